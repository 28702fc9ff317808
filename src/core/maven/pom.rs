use std::collections::{BTreeMap, HashMap};

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{StageError, StageResult};

/// Minimal POM model – only what a platform BOM contributes.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PomDocument {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub packaging: Option<String>,
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
    #[serde(default)]
    pub dependency_management: Option<PomDependencyManagement>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PomDependencies {
    #[serde(default, rename = "dependency")]
    pub items: Vec<PomDependency>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PomDependencyManagement {
    #[serde(default)]
    pub dependencies: Option<PomDependencies>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl PomDocument {
    /// Parse a POM XML string into a `PomDocument`.
    pub fn parse(xml: &str) -> StageResult<Self> {
        let doc: PomDocument = from_str(xml).map_err(|e| StageError::PomParse(e.to_string()))?;
        Ok(doc)
    }

    /// Versions pinned by `dependencyManagement`, keyed by `group:artifact`.
    ///
    /// `${project.version}` and `<properties>` references are interpolated;
    /// entries whose version stays unresolved are dropped.
    pub fn managed_versions(&self) -> BTreeMap<String, String> {
        let mut managed = BTreeMap::new();
        let Some(deps) = self
            .dependency_management
            .as_ref()
            .and_then(|dm| dm.dependencies.as_ref())
        else {
            return managed;
        };

        for dep in &deps.items {
            let Some(raw) = dep.version.as_deref() else {
                continue;
            };
            let version = self.interpolate(raw);
            if version.contains("${") {
                continue;
            }
            managed
                .entry(format!("{}:{}", dep.group_id, dep.artifact_id))
                .or_insert(version);
        }
        managed
    }

    fn interpolate(&self, raw: &str) -> String {
        let mut value = raw.trim().to_string();
        if let Some(version) = &self.version {
            value = value
                .replace("${project.version}", version)
                .replace("${version}", version);
        }
        if let Some(properties) = &self.properties {
            for (key, replacement) in properties {
                value = value.replace(&format!("${{{key}}}"), replacement.trim());
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lwjgl_bom() {
        let xml = r#"
        <project>
            <groupId>org.lwjgl</groupId>
            <artifactId>lwjgl-bom</artifactId>
            <version>3.3.2</version>
            <packaging>pom</packaging>
            <dependencyManagement>
                <dependencies>
                    <dependency>
                        <groupId>org.lwjgl</groupId>
                        <artifactId>lwjgl</artifactId>
                        <version>3.3.2</version>
                    </dependency>
                    <dependency>
                        <groupId>org.lwjgl</groupId>
                        <artifactId>lwjgl</artifactId>
                        <version>3.3.2</version>
                        <classifier>natives-windows</classifier>
                    </dependency>
                    <dependency>
                        <groupId>org.lwjgl</groupId>
                        <artifactId>lwjgl-glfw</artifactId>
                        <version>${project.version}</version>
                    </dependency>
                </dependencies>
            </dependencyManagement>
        </project>
        "#;
        let pom = PomDocument::parse(xml).unwrap();
        assert_eq!(pom.artifact_id.as_deref(), Some("lwjgl-bom"));
        let managed = pom.managed_versions();
        assert_eq!(managed.len(), 2);
        assert_eq!(managed["org.lwjgl:lwjgl"], "3.3.2");
        assert_eq!(managed["org.lwjgl:lwjgl-glfw"], "3.3.2");
    }

    #[test]
    fn properties_are_interpolated_and_unknowns_dropped() {
        let xml = r#"
        <project>
            <version>1.0</version>
            <properties>
                <asm.version>9.5</asm.version>
            </properties>
            <dependencyManagement>
                <dependencies>
                    <dependency>
                        <groupId>org.ow2.asm</groupId>
                        <artifactId>asm</artifactId>
                        <version>${asm.version}</version>
                    </dependency>
                    <dependency>
                        <groupId>org.example</groupId>
                        <artifactId>mystery</artifactId>
                        <version>${missing.version}</version>
                    </dependency>
                </dependencies>
            </dependencyManagement>
        </project>
        "#;
        let managed = PomDocument::parse(xml).unwrap().managed_versions();
        assert_eq!(managed.get("org.ow2.asm:asm").map(String::as_str), Some("9.5"));
        assert!(!managed.contains_key("org.example:mystery"));
    }
}
