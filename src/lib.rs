// Mecanum drive kinematics, control-mode engine and vision target geometry

pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod vision;
