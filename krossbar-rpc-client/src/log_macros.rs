//! Stdout replacements for the `log` macros, used with the `log-to-stdout` feature
//! when the client runs in an environment without a logger installed.

#[doc(hidden)]
#[macro_export]
macro_rules! __stdout_log {
    ($level:literal, $($arg:tt)+) => (println!("{} [{}]: {}", $level, module_path!(), format!($($arg)+)))
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => ($crate::__stdout_log!("ERROR", $($arg)+))
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => ($crate::__stdout_log!("WARN", $($arg)+))
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => ($crate::__stdout_log!("INFO", $($arg)+))
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => ($crate::__stdout_log!("DEBUG", $($arg)+))
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => ($crate::__stdout_log!("TRACE", $($arg)+))
}
