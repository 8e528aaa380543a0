use crate::{ChannelState, IterationRecord};
use feconsts::*;
use log::{debug, info};

pub fn display_header() {
    info!(
        "    {:>3}  {:>12} {:>12} {:>14} {:>16} {:>12} {:>8} {:>9}",
        "", "res_eig", "res_rho", "Fermi(eV)", "charge", "magmom", "nhx", "time(s)"
    );
}

pub fn display_iteration(record: &IterationRecord) {
    info!(
        "    {:>3}: {:>12.4E} {:>12.4E} {:>14.6E} {:>16.8E} {:>12.4E} {:>8} {:>9.3}{}",
        record.iteration,
        record.max_residual_norm,
        record.mixing_residual_norm,
        record.fermi_energy * HA_TO_EV,
        record.total_charge,
        record.magnetization,
        record.n_hx,
        record.wall_time.as_secs_f64(),
        if record.mixing_fell_back { "  (simple)" } else { "" }
    );
}

pub fn display_eigen_values<T>(channels: &[ChannelState<T>], occupations: &[Vec<f64>])
where
    T: linalg::LinalgScalar,
{
    for (ich, (ch, occ)) in channels.iter().zip(occupations.iter()).enumerate() {
        let k = ch.kpoint();

        debug!("");
        debug!(
            "   channel-{} spin = {} k = [ {:.8}, {:.8}, {:.8} ] weight = {:.6}",
            ich + 1,
            ch.spin(),
            k.xyz[0],
            k.xyz[1],
            k.xyz[2],
            k.weight
        );

        print_eigen_values(ch.eigenvalues(), occ);
    }
}

pub fn print_eigen_values(v: &[f64], occ: &[f64]) {
    for (i, (e, f)) in v.iter().zip(occ.iter()).enumerate() {
        debug!("       {:<6} {:16.6} {:12.6}", i + 1, e * HA_TO_EV, f);
    }
}
