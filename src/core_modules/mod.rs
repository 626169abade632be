pub mod blob;
pub mod candidate_filter;
pub mod emitter;
pub mod goal_zone;
pub mod kinematics;
pub mod scorer;
pub mod selector;
pub mod tracker;
