pub mod fuzzy;
pub mod regex;
pub mod options;
pub mod results;
