//! One module per subcommand. Each exposes `execute`.

pub mod add;
pub mod change_passwd;
pub mod dump;
pub mod gen_passwd;
pub mod get;
pub mod init;
pub mod lookup;
pub mod merge;
pub mod remove;
