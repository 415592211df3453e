pub mod broadcast;
pub mod openweather;
pub mod pipeline;
pub mod snapshot;
pub mod upstream;
