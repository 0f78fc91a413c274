pub mod common;

mod voting_tests;
