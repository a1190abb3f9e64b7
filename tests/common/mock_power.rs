use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uartstream::{EnergyMode, PowerManager};

/// Power manager that counts the requirements per energy mode.
#[derive(Debug, Clone, Default)]
pub struct MockPowerManager {
	requirements: Arc<Mutex<HashMap<EnergyMode, usize>>>,
}

impl MockPowerManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// The number of requirements held on `mode`.
	pub fn held(&self, mode: EnergyMode) -> usize {
		self.requirements.lock().unwrap().get(&mode).copied().unwrap_or(0)
	}
}

impl PowerManager for MockPowerManager {
	fn add_requirement(&self, mode: EnergyMode) {
		*self.requirements.lock().unwrap().entry(mode).or_default() += 1;
	}

	fn remove_requirement(&self, mode: EnergyMode) {
		let mut requirements = self.requirements.lock().unwrap();
		let count = requirements.entry(mode).or_default();
		assert!(*count > 0, "removed a requirement on {:?} that was never added", mode);
		*count -= 1;
	}
}
