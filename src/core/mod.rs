// ─── nativestage Core ───
// Resolution, fetching and staging of platform-specific native artifacts.
//
// Architecture:
//   core/
//     platform/    OS × arch tags, LWJGL classifiers, OS rules
//     maven/       Coordinates, version ranges, checksums, repository index, resolver
//     manifest/    Dependency manifest input
//     downloader/  Transport, verified cache, per-entry write locks
//     staging/     Platform selection, staging layout, native extraction
//     pipeline/    Resolve → fetch → stage with retry and bounded parallelism
//     state/       Tool settings

pub mod downloader;
pub mod error;
pub mod http;
pub mod manifest;
pub mod maven;
pub mod pipeline;
pub mod platform;
pub mod staging;
pub mod state;

#[cfg(test)]
pub mod testing;
