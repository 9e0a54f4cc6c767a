//! 具体投递渠道

pub mod local_file;
pub mod stdout;

pub use local_file::LocalFileSink;
pub use stdout::StdoutSink;
