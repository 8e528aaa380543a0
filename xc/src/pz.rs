use feconsts::FOURPI;

const T13: f64 = 1.0 / 3.0;

#[derive(Debug, Clone, Copy)]
struct PZParams {
    gamma: f64,
    beta1: f64,
    beta2: f64,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

const PZ_UNPOLARIZED: PZParams = PZParams {
    gamma: -0.1423,
    beta1: 1.0529,
    beta2: 0.3334,
    a: 0.0311,
    b: -0.048,
    c: 0.0020,
    d: -0.0116,
};

const PZ_POLARIZED: PZParams = PZParams {
    gamma: -0.0843,
    beta1: 1.3981,
    beta2: 0.2611,
    a: 0.01555,
    b: -0.0269,
    c: 0.0007,
    d: -0.0048,
};

// (vc, ec); Pade form for rs > 1, logarithmic expansion below
fn pz_correlation(rho: f64, p: PZParams) -> (f64, f64) {
    let rs = (3.0 / FOURPI / rho).powf(T13);

    if rs > 1.0 {
        let rroot = rs.sqrt();

        let dt = 1.0 + p.beta1 * rroot + p.beta2 * rs;
        let ec = p.gamma / dt;

        let nt = 1.0 + 7.0 / 6.0 * p.beta1 * rroot + 4.0 / 3.0 * p.beta2 * rs;

        (ec * nt / dt, ec)
    } else {
        let rln = rs.ln();

        let vc = p.a * rln
            + (p.b - p.a / 3.0)
            + 2.0 / 3.0 * p.c * rs * rln
            + 1.0 / 3.0 * (2.0 * p.d - p.c) * rs;

        let ec = p.a * rln + p.b + p.c * rs * rln + p.d * rs;

        (vc, ec)
    }
}

pub fn pz_unpolarized(rho: f64) -> (f64, f64) {
    pz_correlation(rho, PZ_UNPOLARIZED)
}

/// (vc_up, vc_dn, ec), interpolated in zeta between the two limits.
pub fn pz_polarized(rho: f64, zeta: f64) -> (f64, f64, f64) {
    let (vc_u, ec_u) = pz_correlation(rho, PZ_UNPOLARIZED);
    let (vc_p, ec_p) = pz_correlation(rho, PZ_POLARIZED);

    let denom = 2.0_f64.powf(4.0 / 3.0) - 2.0;

    let f = ((1.0 + zeta).powf(4.0 / 3.0) + (1.0 - zeta).powf(4.0 / 3.0) - 2.0) / denom;
    let df = 4.0 / 3.0 * ((1.0 + zeta).powf(T13) - (1.0 - zeta).powf(T13)) / denom;

    let ec = ec_u + f * (ec_p - ec_u);
    let vc_comm = vc_u + f * (vc_p - vc_u);

    let vc_up = vc_comm + df * (ec_p - ec_u) * (1.0 - zeta);
    let vc_dn = vc_comm + df * (ec_p - ec_u) * (-1.0 - zeta);

    (vc_up, vc_dn, ec)
}
