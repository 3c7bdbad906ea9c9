pub mod artifacts;
pub mod basemap;
pub mod canvas;
pub mod catalog;
pub mod icons;
pub mod location;
pub mod renderer;
pub mod variant;
