//! # sock-scope-attach — attach the agent to a running host
//!
//! Locates a target process by pid, works out where the agent artifact
//! lives, and asks the host's attach endpoint to load it with the forwarded
//! argument string. The argument string is validated locally first, so a
//! typo is reported without ever touching the target.

use std::path::PathBuf;

use anyhow::Result;
use sock_scope::args::{self, usage};
use sock_scope::attach::{artifact, client};
use sock_scope::domain::ParseError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Default, PartialEq)]
struct AttachFlags {
    pid: Option<i32>,
    artifact_path: Option<PathBuf>,
    arguments: String,
    need_help: bool,
}

fn parse_flags(argv: &[String]) -> AttachFlags {
    let mut flags = AttachFlags::default();
    for arg in argv {
        if arg == "-h" || arg == "--help" || arg == "-help" {
            flags.need_help = true;
        } else if let Some(value) = arg.strip_prefix("-pid=") {
            match value.parse::<i32>() {
                Ok(pid) => flags.pid = Some(pid),
                Err(_) => flags.need_help = true,
            }
        } else if let Some(value) = arg.strip_prefix("-agentjarpath=") {
            flags.artifact_path = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("-agentargs=") {
            // The value may itself contain '='; only the first split counts.
            flags.arguments = value.to_string();
        } else {
            flags.need_help = true;
        }
    }
    flags
}

fn print_attach_usage() {
    eprintln!(
        "to attach sock-scope to an already running host, rerun as:\n\n\
         \tsock-scope-attach -pid=<PID> [-agentjarpath=<path>] [-agentargs='<args>']\n"
    );
    eprintln!("{}", usage());
}

fn run() -> Result<i32> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let flags = parse_flags(&argv);

    // Validate the forwarded arguments before touching the target process.
    match args::parse_arguments(&flags.arguments) {
        Ok(_) => {}
        Err(ParseError::HelpRequested) => {
            print_attach_usage();
            return Ok(EXIT_SUCCESS);
        }
        Err(e) => {
            eprintln!("invalid -agentargs: {e}\n");
            print_attach_usage();
            return Ok(EXIT_FAILURE);
        }
    }

    if flags.need_help {
        print_attach_usage();
        return Ok(EXIT_FAILURE);
    }
    let Some(pid) = flags.pid else {
        eprintln!("missing required flag -pid=<PID>\n");
        print_attach_usage();
        return Ok(EXIT_FAILURE);
    };

    let artifact_path = match flags.artifact_path {
        Some(path) => path,
        None => artifact::resolve_agent_artifact()?,
    };
    log::debug!("attaching to pid {pid} with arguments {:?}", flags.arguments);

    println!("about to load agent from path [{}]", artifact_path.display());
    client::attach_and_load(pid, &artifact_path, &flags.arguments)?;
    println!("agent loaded into pid {pid}");
    Ok(EXIT_SUCCESS)
}

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    });
}
