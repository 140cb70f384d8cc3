pub mod check;
pub mod routes;
