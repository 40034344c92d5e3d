use crate::error::{ConnectionError, OpResult};
use crate::{Target, TargetHandle};

/// NullTarget does nothing. It can be used to measure the overhead of the harness.
#[derive(Clone)]
pub struct NullTarget;

impl NullTarget {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl Target for NullTarget {
    fn connect(&self, _endpoint: Option<&str>) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        Ok(Box::new(self.clone()))
    }

    fn connect_primary(&self) -> Result<Box<dyn TargetHandle>, ConnectionError> {
        Ok(Box::new(self.clone()))
    }
}

impl TargetHandle for NullTarget {
    fn set(&mut self, _key: &str, _value: &str) -> OpResult {
        Ok(())
    }

    fn get(&mut self, _key: &str) -> OpResult {
        Ok(())
    }

    fn hset(&mut self, _key: &str, _field: &str, _value: i64) -> OpResult {
        Ok(())
    }

    fn hget(&mut self, _key: &str, _field: &str) -> OpResult {
        Ok(())
    }

    fn lpush(&mut self, _key: &str, _members: &[String]) -> OpResult {
        Ok(())
    }

    fn lrange(&mut self, _key: &str, _start: isize, _stop: isize) -> OpResult {
        Ok(())
    }

    fn sadd(&mut self, _key: &str, _members: &[String]) -> OpResult {
        Ok(())
    }

    fn smembers(&mut self, _key: &str) -> OpResult {
        Ok(())
    }

    fn zadd(&mut self, _key: &str, _members: &[(String, f64)]) -> OpResult {
        Ok(())
    }

    fn zrange(&mut self, _key: &str, _start: isize, _stop: isize) -> OpResult {
        Ok(())
    }

    fn flushdb(&mut self) -> OpResult {
        Ok(())
    }
}
