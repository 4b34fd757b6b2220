//! Producing the machine-readable release-manifest.json

use camino::Utf8Path;
use ecli_dist_schema::{Artifact, ArtifactKind, ReleaseManifest};

use crate::errors::DistResult;
use crate::tasks::ReleaseGraph;

/// Build the manifest describing what this run releases
///
/// The checksum field is read back from the sidecar, so it only appears once
/// the sidecar really exists on disk.
pub fn build_manifest(graph: &ReleaseGraph) -> ReleaseManifest {
    let mut manifest = ReleaseManifest::new(
        Some(env!("CARGO_PKG_VERSION").to_owned()),
        graph.app.name.clone(),
        graph.app.version.to_string(),
    );

    let artifact = &graph.artifact;
    let checksum = axoasset::LocalAsset::load_string(&artifact.sidecar_path)
        .ok()
        .map(|contents| contents.trim().to_owned());

    manifest.artifacts.push(Artifact {
        name: artifact.file_name.clone(),
        kind: ArtifactKind::InstallablePackage,
        target_platform: artifact.platform_tag.to_owned(),
        path: Some(artifact.path.clone()),
        checksum: checksum.clone(),
    });
    manifest.artifacts.push(Artifact {
        name: artifact.sidecar_name.clone(),
        kind: ArtifactKind::Checksum,
        target_platform: artifact.platform_tag.to_owned(),
        path: Some(artifact.sidecar_path.clone()),
        checksum,
    });

    manifest
}

/// Write the manifest to disk
pub fn save_manifest(manifest_path: &Utf8Path, manifest: &ReleaseManifest) -> DistResult<()> {
    let contents = serde_json::to_string_pretty(manifest).unwrap();
    axoasset::LocalAsset::write_new_all(&contents, manifest_path)?;
    Ok(())
}
