//! Data model for `lsblk --json` output.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Disk,
    Part,
    Crypt,
    Lvm,
    #[serde(other)]
    Other,
}

/// One node of the lsblk device tree. lsblk reports empty fields as null,
/// and some builds report them as empty strings; both become None here.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub size: Option<String>,
    #[serde(rename = "type")]
    pub kind: DeviceType,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub fstype: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

#[derive(Debug, Deserialize)]
pub struct LsblkReport {
    pub blockdevices: Vec<BlockDevice>,
}

impl BlockDevice {
    pub fn path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    pub fn size_label(&self) -> &str {
        self.size.as_deref().unwrap_or("?")
    }

    /// All descendants of this device, depth first. Crypt and LVM volumes
    /// nest under partitions, so the walk has to recurse.
    pub fn descendants(&self) -> Vec<&BlockDevice> {
        let mut out = Vec::new();
        for child in &self.children {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsblk_tree() {
        let json = r#"{
            "blockdevices": [
                {"name": "sda", "size": "931.5G", "type": "disk", "fstype": null,
                 "mountpoint": null, "children": [
                    {"name": "sda1", "size": "931.5G", "type": "part",
                     "fstype": "crypto_LUKS", "mountpoint": null, "children": [
                        {"name": "vault", "size": "931.5G", "type": "crypt",
                         "fstype": "ext4", "mountpoint": "/vault"}
                    ]}
                ]}
            ]
        }"#;

        let report: LsblkReport = serde_json::from_str(json).unwrap();
        let disk = &report.blockdevices[0];
        assert_eq!(disk.kind, DeviceType::Disk);
        assert_eq!(disk.path(), "/dev/sda");

        let descendants = disk.descendants();
        assert_eq!(descendants.len(), 2);
        assert_eq!(descendants[1].kind, DeviceType::Crypt);
        assert_eq!(descendants[1].mountpoint.as_deref(), Some("/vault"));
    }

    #[test]
    fn test_empty_strings_become_none() {
        let json = r#"{"name": "sdb", "size": "16G", "type": "disk",
                       "fstype": "", "mountpoint": ""}"#;
        let dev: BlockDevice = serde_json::from_str(json).unwrap();
        assert!(dev.fstype.is_none());
        assert!(dev.mountpoint.is_none());
        assert!(dev.descendants().is_empty());
    }

    #[test]
    fn test_unknown_type_maps_to_other() {
        let json = r#"{"name": "sr0", "size": "1024M", "type": "rom"}"#;
        let dev: BlockDevice = serde_json::from_str(json).unwrap();
        assert_eq!(dev.kind, DeviceType::Other);
    }
}
