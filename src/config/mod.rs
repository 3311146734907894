pub mod config;
pub mod device_profile;

pub use config::Config;
pub use device_profile::DeviceProfile;
