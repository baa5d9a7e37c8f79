//! Aurora — an offline, deterministic music-production pipeline.
//!
//! Aurora ingests a single source file written in a dedicated declarative
//! language describing synthesizer patches, effect buses, a tempo map, and a
//! timed score of events, and renders it to a bit-reproducible set of audio
//! stems, a master mixdown, and per-patch MIDI tracks. Given the same input
//! and seed, this crate always produces byte-identical output.
//!
//! # Determinism
//!
//! All stochastic behavior (the `seq` generator, noise synthesis) is driven
//! by [`rng::Pcg32`], seeded from a [`rng::hash64_from_parts`] of the caller's
//! seed plus a structured key (patch name, section name, voice index, ...).
//! No wall-clock time, thread interleaving, or hash-map iteration order ever
//! reaches an output sample.
//!
//! # Pipeline
//!
//! Source text flows through the modules below in order; [`pipeline::render`]
//! is the single entry point that drives all of them:
//!
//! - [`lexer`] / [`parser`] lower source text into a typed [`ast::Document`].
//! - [`validator`] runs structural/semantic checks, accumulating errors and
//!   warnings rather than stopping at the first one.
//! - [`timebase`] builds the piecewise tempo map and converts between beats,
//!   seconds, and samples.
//! - [`expander`] walks sections and resolves `play`/`automate`/`seq` into a
//!   sorted list of voice-play occurrences and automation lanes.
//! - [`program`] linearizes each patch's and bus's signal graph into a flat
//!   DSP program.
//! - [`render`] synthesizes each play occurrence into its patch's stem.
//! - [`mix`] accumulates sends into bus buffers, runs bus DSP, and sums the
//!   master mix with a `tanh` soft clip.
//! - [`midi`] emits per-patch note/CC tracks from the same expanded events.
//!
//! Container codecs (WAV, Standard MIDI File, JSON) and the filesystem layer
//! are out of scope; this crate hands back in-memory buffers and structured
//! data for an external writer to serialize.

pub mod ast;
pub mod error;
pub mod expander;
pub mod lexer;
pub mod midi;
pub mod mix;
pub mod parser;
pub mod pipeline;
pub mod program;
pub mod render;
pub mod rng;
pub mod timebase;
pub mod validator;
pub mod value;

pub use error::{exit_code, AuroraError};
pub use midi::MidiTable;
pub use pipeline::{render, AudioStem, RenderMetadata, RenderOptions, RenderOutput};
