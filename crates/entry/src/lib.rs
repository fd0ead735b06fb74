/// Declares the program entry point for a workload.
///
/// The workload is a `fn() -> !`; the exit call that follows it satisfies
/// the entry-point convention and is never reached while the workload runs.
/// The host stops the process by killing it.
///
/// ```ignore
/// entry::workload_main!(workload::run);
/// ```
#[macro_export]
macro_rules! workload_main {
    ($path:path) => {
        const WORKLOAD_MAIN: fn() -> ! = $path;

        #[allow(unreachable_code)]
        fn main() {
            WORKLOAD_MAIN();

            // unreachable: WORKLOAD_MAIN diverges
            $crate::terminate()
        }
    };
}

/// Hands the process back to the host with [`configuration::EXIT_STATUS`].
pub fn terminate() -> ! {
    std::process::exit(configuration::EXIT_STATUS)
}
