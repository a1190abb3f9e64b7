#![allow(dead_code, unused_imports)]

mod mock_channel;
mod mock_power;

pub use mock_channel::MockChannel;
pub use mock_power::MockPowerManager;

use std::time::Duration;

/// Give a spawned thread time to block.
pub fn settle() {
	std::thread::sleep(Duration::from_millis(50));
}
