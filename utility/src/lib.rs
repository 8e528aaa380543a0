use itertools::multizip;
use rand::Rng;
use types::Scalar;

pub fn get_slice_up_dn<T>(v: &[T]) -> (&[T], &[T]) {
    let n = v.len() / 2;

    v.split_at(n)
}

pub fn get_mut_slice_up_dn<T>(v: &mut [T]) -> (&mut [T], &mut [T]) {
    let n = v.len() / 2;

    v.split_at_mut(n)
}

/// conj(u) . v
pub fn dot_product<T: Scalar>(u: &[T], v: &[T]) -> T {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter()))
        .map(|(x, y)| x.conj() * *y)
        .sum()
}

pub fn ddot_product(u: &[f64], v: &[f64]) -> f64 {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter()))
        .map(|(x, y)| (*x) * (*y))
        .sum()
}

/// sum_i u_i w_i v_i
pub fn ddot_product_metric(u: &[f64], v: &[f64], metric: &[f64]) -> f64 {
    assert_eq!(u.len(), v.len());
    assert_eq!(u.len(), metric.len());

    multizip((u.iter(), v.iter(), metric.iter()))
        .map(|(x, y, w)| x * w * y)
        .sum()
}

/// sqrt(sum_i w_i (a_i - b_i)^2)
pub fn weighted_distance(a: &[f64], b: &[f64], metric: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.len(), metric.len());

    multizip((a.iter(), b.iter(), metric.iter()))
        .map(|(x, y, w)| {
            let d = x - y;
            w * d * d
        })
        .sum::<f64>()
        .sqrt()
}

pub fn l2_norm_sqr<T: Scalar>(v: &[T]) -> f64 {
    v.iter().map(|x| x.abs2()).sum::<f64>()
}

pub fn l2_norm<T: Scalar>(v: &[T]) -> f64 {
    l2_norm_sqr(v).sqrt()
}

pub fn normalize_vector<T: Scalar>(v: &mut [T]) {
    let s = l2_norm(v);

    if s > 0.0 {
        v.iter_mut().for_each(|x| *x /= s);
    }
}

/// Entries uniform in [-0.5, 0.5); complex entries get a random phase.
pub fn fill_rand_vector<T: Scalar, R: Rng>(rng: &mut R, v: &mut [T]) {
    for y in v.iter_mut() {
        let t = rng.gen_range(-0.5f64..0.5f64);

        *y = if T::IS_COMPLEX {
            let theta = rng.gen_range(0.0f64..std::f64::consts::TAU);
            T::from_re_im(t * theta.cos(), t * theta.sin()).unwrap_or_else(|| T::from_re(t))
        } else {
            T::from_re(t)
        };
    }
}

pub fn make_normalized_rand_vector<T: Scalar, R: Rng>(rng: &mut R, v: &mut [T]) {
    fill_rand_vector(rng, v);

    normalize_vector(v);
}

/// Contiguous share [start, end) of `n` items for member `rank` of `size`.
pub fn block_range(n: usize, size: usize, rank: usize) -> std::ops::Range<usize> {
    let size = size.max(1);
    let base = n / size;
    let rem = n % size;

    let start = rank * base + rank.min(rem);
    let len = base + usize::from(rank < rem);

    start.min(n)..(start + len).min(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use types::c64;

    #[test]
    fn test_dot_product_conjugates_left() {
        let u = vec![c64::new(0.0, 1.0)];
        let v = vec![c64::new(0.0, 1.0)];

        assert_eq!(dot_product(&u, &v), c64::new(1.0, 0.0));
        assert_eq!(ddot_product(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
    }

    #[test]
    fn test_weighted_distance() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 0.0];
        let w = vec![5.0, 0.25];

        assert_eq!(weighted_distance(&a, &b, &w), 1.0);
        assert_eq!(weighted_distance(&a, &a, &w), 0.0);
    }

    #[test]
    fn test_seeded_rand_vector_is_reproducible() {
        let mut v1 = vec![c64::new(0.0, 0.0); 8];
        let mut v2 = vec![c64::new(0.0, 0.0); 8];

        make_normalized_rand_vector(&mut StdRng::seed_from_u64(7), &mut v1);
        make_normalized_rand_vector(&mut StdRng::seed_from_u64(7), &mut v2);

        assert_eq!(v1, v2);
        assert!((l2_norm(&v1) - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_block_range() {
        let r: Vec<_> = (0..3).map(|rank| block_range(7, 3, rank)).collect();

        assert_eq!(r, vec![0..3, 3..5, 5..7]);
        assert_eq!(block_range(2, 4, 3), 2..2);
    }

    #[test]
    fn test_up_dn_split() {
        let mut v = vec![1, 2, 3, 4];

        let (up, dn) = get_mut_slice_up_dn(&mut v);
        up[0] = 10;
        dn[1] = 40;

        assert_eq!(get_slice_up_dn(&v), (&[10, 2][..], &[3, 40][..]));
    }
}
