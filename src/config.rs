// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Configuration for the pack factory. Files are read through the `config` crate, so YAML and
//! TOML both work, and resolved into the runtime types the rest of the crate uses.
mod audio;
mod category;
mod error;
mod factory;
mod library;
mod limits;

pub use self::audio::Audio;
pub use self::category::Category;
pub use self::error::ConfigError;
pub use self::factory::PackFactory;
pub use self::library::Library;
pub use self::limits::Limits;
