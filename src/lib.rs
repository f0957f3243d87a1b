pub mod capture;
pub mod device;
pub mod field;
pub mod harness;
pub mod rpc;
pub mod sim;
pub mod stream;
pub mod suite;

#[cfg(test)]
mod test;
