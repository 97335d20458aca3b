//! The agent artifact has no standalone mode; running it directly only
//! explains how it is meant to be used.

fn main() {
    env_logger::init();
    eprintln!(
        "sock-scope runs embedded in a module-hosting runtime; it does nothing standalone.\n\n\
         Either bootstrap it at host startup:\n\
         \tsock_scope::session::bootstrap(\"<args>\", &context, &host, probe_sources)\n\n\
         or attach it to an already-running host:\n\
         \tsock-scope-attach -pid=<PID> -agentargs='<args>'\n"
    );
    eprintln!("{}", sock_scope::args::usage());
    std::process::exit(1);
}
