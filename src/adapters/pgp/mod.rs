pub mod rpgp_backend;
