mod availability;
mod common;
mod service;
