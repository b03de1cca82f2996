pub mod gen_cert;
pub mod run;
