pub mod enterprise;
