// MIT License
//
// Copyright (c) 2019 Lukas Lueg (lukas.lueg@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! `restruct` describes C-style binary layouts at runtime and converts
//! between them and structured values.
//!
//! A [`Descriptor`] is built up from the primitive kinds ([`IntDesc`],
//! [`enum_::EnumDesc`], [`bitmap::BitmapDesc`], [`bitfield::BitfieldDesc`],
//! [`string::StringDesc`], [`pad::PadDesc`], [`terminated::TerminatedDesc`])
//! and the composite kinds ([`array::ArrayDesc`], [`struct_::StructDesc`],
//! [`union_::UnionDesc`]), then packs a [`Value`] into bytes or unpacks
//! bytes back into one:
//!
//! ```
//! use restruct::{Descriptor, IntDesc, Endian, Value};
//!
//! let version = Descriptor::Int(IntDesc::u16().with_endian(Endian::Big));
//! let packed = version.pack(&Value::Int(7)).unwrap();
//! assert_eq!(packed, vec![0, 7]);
//! assert_eq!(version.unpack(&packed).unwrap(), Value::Int(7));
//! ```
//!
//! It is a brainchild of
//! [Python's struct-module](https://docs.python.org/3/library/struct.html),
//! generalized to enums, bitmaps, bitfields, and self-describing
//! composites.

pub mod array;
pub mod bitfield;
pub mod bitmap;
mod builder;
mod descriptor;
mod endian;
pub mod enum_;
mod error;
pub mod int;
mod io;
pub mod pad;
pub mod string;
pub mod struct_;
pub mod terminated;
pub mod union_;
mod value;

pub use builder::{register, type_lookup, BuilderScope};
pub use descriptor::Descriptor;
pub use endian::{default_endian, host_endian, set_default_endian, Endian};
pub use error::{Error, Result};
pub use int::{IntDesc, IntWidth};
pub use value::Value;
