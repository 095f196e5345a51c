mod common;
mod permissions;
mod scoring;
