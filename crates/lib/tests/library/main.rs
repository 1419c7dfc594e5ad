mod common;
mod discovery_tests;
mod export_tests;
mod inheritance_tests;
mod task_tests;
