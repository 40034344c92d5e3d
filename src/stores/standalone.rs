//! Independent servers, one connection per worker and endpoint.
//!
//! This target is [`Target`] over [`redis::Connection`].

use crate::error::ConnectionError;
use crate::stores::{ping, RespHandle, TargetOpt};
use crate::{Target, TargetHandle};
use log::debug;
use redis::{Client, ConnectionInfo, IntoConnectionInfo};

pub struct StandaloneTarget {
    opt: TargetOpt,
}

impl StandaloneTarget {
    pub fn new(opt: &TargetOpt) -> Self {
        Self { opt: opt.clone() }
    }

    fn connection_info(&self, endpoint: &str) -> redis::RedisResult<ConnectionInfo> {
        let mut info = format!("redis://{}", endpoint).into_connection_info()?;
        info.redis.db = self.opt.db;
        info.redis.password = self.opt.password.clone();
        Ok(info)
    }

    fn open(&self, endpoint: &str) -> redis::RedisResult<redis::Connection> {
        let client = Client::open(self.connection_info(endpoint)?)?;
        let mut con = client.get_connection_with_timeout(self.opt.connect_timeout)?;
        con.set_read_timeout(Some(self.opt.io_timeout))?;
        con.set_write_timeout(Some(self.opt.io_timeout))?;
        ping(&mut con)?;
        Ok(con)
    }
}

impl Target for StandaloneTarget {
    fn connect(&self, endpoint: Option<&str>) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        let endpoint = endpoint.unwrap_or_else(|| self.opt.primary());
        debug!("Connecting to {} (db {})", endpoint, self.opt.db);
        let con = self
            .open(endpoint)
            .map_err(|e| ConnectionError::new(endpoint, e))?;
        Ok(Box::new(RespHandle::new(con)))
    }

    fn connect_primary(&self) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        self.connect(None)
    }
}
