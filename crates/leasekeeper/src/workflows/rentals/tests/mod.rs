mod availability;
mod common;
mod properties;
