pub mod initializer;
