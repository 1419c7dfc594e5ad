mod check;
mod clean;
mod export;
mod info;
mod run;
mod session;
mod show;

pub use check::cmd_check;
pub use clean::cmd_clean;
pub use export::cmd_export;
pub use info::cmd_info;
pub use run::cmd_run;
pub use session::SessionOptions;
pub use show::cmd_show;
