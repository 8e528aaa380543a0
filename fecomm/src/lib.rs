//! Collective operations over the process groups a run is split into.
//!
//! Every rank of a group must enter the same collective in the same order.

use std::sync::Arc;
use types::Scalar;

pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn all_reduce_sum(&self, buf: &mut [f64]);

    fn all_reduce_max(&self, buf: &mut [f64]);

    fn all_reduce_min(&self, buf: &mut [f64]);

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Single-process group; every collective is the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buf: &mut [f64]) {}

    fn all_reduce_max(&self, _buf: &mut [f64]) {}

    fn all_reduce_min(&self, _buf: &mut [f64]) {}
}

pub fn all_reduce_slice_sum<T: Scalar>(comm: &dyn Communicator, buf: &mut [T]) {
    if comm.size() == 1 {
        return;
    }

    let mut reals = Vec::with_capacity(buf.len() * T::N_REALS);
    T::write_reals(buf, &mut reals);

    comm.all_reduce_sum(&mut reals);

    T::read_reals(&reals, buf);
}

pub fn all_reduce_scalar_sum(comm: &dyn Communicator, x: f64) -> f64 {
    let mut buf = [x];
    comm.all_reduce_sum(&mut buf);
    buf[0]
}

pub fn all_reduce_scalar_max(comm: &dyn Communicator, x: f64) -> f64 {
    let mut buf = [x];
    comm.all_reduce_max(&mut buf);
    buf[0]
}

pub fn all_reduce_scalar_min(comm: &dyn Communicator, x: f64) -> f64 {
    let mut buf = [x];
    comm.all_reduce_min(&mut buf);
    buf[0]
}

/// The three groups a run is split into: the spatial domain, the
/// k-point pool and the band group.
#[derive(Clone)]
pub struct ProcessGroups {
    domain: Arc<dyn Communicator>,
    kpool: Arc<dyn Communicator>,
    band: Arc<dyn Communicator>,
}

impl ProcessGroups {
    pub fn new(
        domain: Arc<dyn Communicator>,
        kpool: Arc<dyn Communicator>,
        band: Arc<dyn Communicator>,
    ) -> Self {
        ProcessGroups { domain, kpool, band }
    }

    pub fn serial() -> Self {
        ProcessGroups {
            domain: Arc::new(SerialComm),
            kpool: Arc::new(SerialComm),
            band: Arc::new(SerialComm),
        }
    }

    pub fn domain(&self) -> &dyn Communicator {
        self.domain.as_ref()
    }

    pub fn kpool(&self) -> &dyn Communicator {
        self.kpool.as_ref()
    }

    pub fn band(&self) -> &dyn Communicator {
        self.band.as_ref()
    }
}
