pub use modflow_test_utils::init_tracing;
