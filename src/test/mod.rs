mod capture_verify;
mod field_mutator;
mod rpc;
mod sim_generator;
