pub mod avalon;
