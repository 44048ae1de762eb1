pub mod region;
pub mod strand;

// re-export for cleaner imports
pub use self::region::Region;
pub use self::strand::Strand;
