use std::process::Command;

/// Run a command and return its trimmed stdout, or `unknown` if it fails.
fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    // Stamped into `otp-relay version`.
    let git_hash = command_output("git", &["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=OTP_RELAY_GIT_HASH={}", git_hash);

    // Build scripts cannot use the crate's own dependencies.
    let build_date = command_output("date", &["+%Y-%m-%d"]);
    println!("cargo:rustc-env=OTP_RELAY_BUILD_DATE={}", build_date);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}
