// Interrupt handlers call these too, so the disabled variants must not evaluate anything.
// `format_args!` behind `if false` keeps the arguments type-checked and "used".

#[cfg(feature = "log")]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { ::log::trace!(target: "uartstream", $($args)*) }
	}

	macro_rules! debug {
		($($args:tt)*) => { ::log::debug!(target: "uartstream", $($args)*) }
	}

	macro_rules! info {
		($($args:tt)*) => { ::log::info!(target: "uartstream", $($args)*) }
	}

	macro_rules! warn {
		($($args:tt)*) => { ::log::warn!(target: "uartstream", $($args)*) }
	}

	macro_rules! error {
		($($args:tt)*) => { ::log::error!(target: "uartstream", $($args)*) }
	}
}

#[cfg(not(feature = "log"))]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { if false { let _ = format_args!($($args)*); } }
	}

	macro_rules! debug {
		($($args:tt)*) => { if false { let _ = format_args!($($args)*); } }
	}

	macro_rules! info {
		($($args:tt)*) => { if false { let _ = format_args!($($args)*); } }
	}

	macro_rules! warn {
		($($args:tt)*) => { if false { let _ = format_args!($($args)*); } }
	}

	macro_rules! error {
		($($args:tt)*) => { if false { let _ = format_args!($($args)*); } }
	}
}
