//! Basic usage example
//!
//! Try:
//!
//! ```text
//! cargo run --example basic -- -int 1
//! STRING=bar BOOL=true cargo run --example basic
//! INT=nope cargo run --example basic
//! cargo run --example basic -- -help
//! ```

use tracing_subscriber::EnvFilter;

fn main() {
    // RUST_LOG=flagenv=debug shows which flags came from the environment
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (string_flag, bool_flag, int_flag) = {
        let mut fs = flagenv::command_line();
        (
            fs.string("string", "foo", "string flag"),
            fs.bool("bool", false, "bool flag"),
            fs.int("int", 666, "int flag"),
        )
    };

    // Reads STRING, BOOL and INT for flags not given on the command line
    flagenv::parse(flagenv::Options::new());

    println!("-string = {:?}", string_flag.get());
    println!("-bool   = {}", bool_flag.get());
    println!("-int    = {}", int_flag.get());
}
