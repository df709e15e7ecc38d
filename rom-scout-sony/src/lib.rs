//! Sony disc image parsers (PS1, PS2, PSP).

pub mod disc;
