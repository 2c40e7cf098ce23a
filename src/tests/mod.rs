//! Whole-turn scenarios played through a `Session` host.
