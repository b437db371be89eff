pub mod class_controller;

pub use class_controller::ClassController;
