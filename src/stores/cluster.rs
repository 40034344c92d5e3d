//! A single logical cluster seeded by all endpoints. Keys are routed by the client.
//!
//! This target is [`Target`] over [`redis::cluster::ClusterConnection`]. The database index does
//! not apply to a cluster; the post-run flush goes through a plain connection to the primary
//! endpoint instead.

use crate::error::ConnectionError;
use crate::stores::standalone::StandaloneTarget;
use crate::stores::{ping, RespHandle, TargetOpt};
use crate::{Target, TargetHandle};
use log::debug;
use redis::cluster::{ClusterClient, ClusterClientBuilder, ClusterConnection};

pub struct ClusterTarget {
    opt: TargetOpt,
    primary: StandaloneTarget,
}

impl ClusterTarget {
    pub fn new(opt: &TargetOpt) -> Self {
        Self {
            opt: opt.clone(),
            primary: StandaloneTarget::new(opt),
        }
    }

    fn nodes(&self) -> Vec<String> {
        self.opt
            .endpoints
            .iter()
            .map(|e| format!("redis://{}", e))
            .collect()
    }

    fn client(&self) -> redis::RedisResult<ClusterClient> {
        let mut builder = ClusterClientBuilder::new(self.nodes())
            .connection_timeout(self.opt.connect_timeout)
            .response_timeout(self.opt.io_timeout);
        if let Some(password) = &self.opt.password {
            builder = builder.password(password.clone());
        }
        builder.build()
    }

    fn open(&self) -> redis::RedisResult<ClusterConnection> {
        let mut con = self.client()?.get_connection()?;
        ping(&mut con)?;
        Ok(con)
    }
}

impl Target for ClusterTarget {
    fn connect(&self, _endpoint: Option<&str>) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        debug!("Connecting to cluster {:?}", self.opt.endpoints);
        let con = self
            .open()
            .map_err(|e| ConnectionError::new(self.opt.endpoints.join(","), e))?;
        Ok(Box::new(RespHandle::new(con)))
    }

    fn connect_primary(&self) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        self.primary.connect(None)
    }
}
