use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 16] = [
        "RUST_LOG",
        "SPS_HOST",
        "SPS_PORT",
        "SPS_DATABASE_URL",
        "SPS_DB_MAX_CONNECTIONS",
        "SPS_USE_X_FORWARDED_FOR",
        "SPS_USE_FORWARDED",
        "SPS_EVENT_BUFFER_SIZE",
        "SPS_PUSH_TOKEN_CACHE_TTL",
        "SPS_PAYMENT_EXPIRY_GRACE",
        "SPS_VNP_TMN_CODE",
        "SPS_VNP_URL",
        "SPS_VNP_RETURN_URL",
        "SPS_VNP_ENVIRONMENT",
        "SPS_VNP_TRUST_UNSIGNED",
        "SPS_VNP_UTC_OFFSET_HOURS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
