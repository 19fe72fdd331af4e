//! Static provider GPU registry (spec §3 "Provider GPU registry", §4.1).

/// One entry in the provider's catalog of GPU types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuType {
    pub id: &'static str,
    pub display_name: &'static str,
    pub vram_gb: u32,
    pub cost_index: u32,
}

/// The provider's serverless inventory, ordered by general availability
/// and cost-efficiency.
pub const REGISTRY: &[GpuType] = &[
    GpuType { id: "AMPERE_16", display_name: "NVIDIA A16", vram_gb: 16, cost_index: 1 },
    GpuType { id: "AMPERE_24", display_name: "NVIDIA A10 / A30", vram_gb: 24, cost_index: 2 },
    GpuType { id: "ADA_24", display_name: "NVIDIA L40 / RTX 4090", vram_gb: 24, cost_index: 3 },
    GpuType { id: "AMPERE_48", display_name: "NVIDIA A40", vram_gb: 48, cost_index: 5 },
    GpuType { id: "ADA_48_PRO", display_name: "NVIDIA L40S", vram_gb: 48, cost_index: 6 },
    GpuType { id: "AMPERE_80", display_name: "NVIDIA A100", vram_gb: 80, cost_index: 8 },
    GpuType { id: "ADA_80_PRO", display_name: "NVIDIA H100", vram_gb: 80, cost_index: 10 },
];

/// Tier-name → candidate id set, consulted first by the selector (spec §4.1 step 1).
/// Includes both qualitative tiers (ECONOMY/STANDARD/PRO/ULTIMATE) and
/// hardware-specific aliases (A100, H100, ...) for callers that know what
/// they want.
pub fn tier_candidates(tier: &str) -> Option<&'static [&'static str]> {
    match tier.to_uppercase().as_str() {
        "ECONOMY" => Some(&["AMPERE_16", "AMPERE_24"]),
        "STANDARD" => Some(&["ADA_24", "AMPERE_24"]),
        "PRO" => Some(&["AMPERE_48", "ADA_48_PRO"]),
        "ULTIMATE" => Some(&["AMPERE_80", "ADA_80_PRO"]),
        "A16" => Some(&["AMPERE_16"]),
        "A10" => Some(&["AMPERE_24"]),
        "A40" => Some(&["AMPERE_48"]),
        "A100" => Some(&["AMPERE_80"]),
        "H100" => Some(&["ADA_80_PRO"]),
        "4090" => Some(&["ADA_24"]),
        _ => None,
    }
}

/// Look up a GPU type by its provider id.
pub fn by_id(id: &str) -> Option<GpuType> {
    REGISTRY.iter().copied().find(|g| g.id == id)
}
