//! Minimum GPU memory estimation (spec §4.2 "VRAM estimation").
//!
//! Priority order: curated registry hit (authoritative) → safetensors
//! dtype byte-accounting → parameter-count heuristic → conservative default.

use std::collections::HashMap;

/// GPU memory tiers snapped UP to by the safetensors estimator.
const TIERS_GB: &[u32] = &[6, 8, 10, 12, 16, 24, 28, 40, 48, 80];

/// Headroom multiplier applied to raw weight bytes before snapping to a tier.
const HEADROOM: f64 = 1.35;

/// Conservative default when nothing else applies.
const DEFAULT_VRAM_GB: u32 = 16;

/// Bytes per scalar for every dtype the safetensors estimator must cover
/// (spec §4.2).
pub fn bytes_per_dtype(dtype: &str) -> Option<u32> {
    Some(match dtype {
        "BF16" | "F16" | "I16" | "U16" => 2,
        "F32" | "I32" | "U32" => 4,
        "F64" | "I64" | "U64" => 8,
        "I8" | "U8" | "F8_E4M3" | "F8_E5M2" => 1,
        "BOOL" => 1,
        _ => return None,
    })
}

/// Curated registry of known model ids to their authoritative VRAM
/// requirement in GB. Always wins over any estimator (spec §4.2 step 1,
/// §8 invariant "Dtype estimator... unreachable").
pub fn curated_registry() -> &'static HashMap<&'static str, u32> {
    use std::sync::OnceLock;
    static REGISTRY: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        HashMap::from([
            ("black-forest-labs/FLUX.1-schnell", 24),
            ("black-forest-labs/FLUX.1-dev", 24),
            ("stabilityai/sd-turbo", 8),
            ("stabilityai/stable-diffusion-xl-base-1.0", 12),
            ("runwayml/stable-diffusion-v1-5", 6),
        ])
    })
}

/// Snap a raw byte count (already including headroom) up to the nearest
/// GPU tier, never below the smallest tier.
pub fn snap_to_tier(raw_bytes: f64) -> u32 {
    let raw_gb = raw_bytes / (1024.0 * 1024.0 * 1024.0);
    for &tier in TIERS_GB {
        if raw_gb <= tier as f64 {
            return tier;
        }
    }
    *TIERS_GB.last().unwrap()
}

/// Estimate VRAM from a safetensors dtype→parameter-count map:
/// `Σ count × bytes_per_dtype × headroom`, snapped up to the nearest tier.
pub fn estimate_from_safetensors(params_by_dtype: &HashMap<String, u64>) -> Option<u32> {
    if params_by_dtype.is_empty() {
        return None;
    }
    let mut total_bytes = 0.0f64;
    for (dtype, count) in params_by_dtype {
        let bytes = bytes_per_dtype(dtype)?;
        total_bytes += (*count as f64) * (bytes as f64);
    }
    Some(snap_to_tier(total_bytes * HEADROOM))
}

/// Coarser piecewise table keyed on raw parameter count alone (spec §4.2
/// step 3), used only when per-dtype breakdown isn't available.
pub fn estimate_from_param_count(total_params: u64) -> u32 {
    match total_params {
        p if p <= 1_000_000_000 => 6,
        p if p <= 3_000_000_000 => 8,
        p if p <= 7_000_000_000 => 16,
        p if p <= 13_000_000_000 => 24,
        p if p <= 34_000_000_000 => 40,
        p if p <= 70_000_000_000 => 80,
        _ => 80,
    }
}

/// Final estimate, applying the full priority order (spec §4.2).
pub fn estimate_vram_gb(
    hf_model_id: &str,
    params_by_dtype: Option<&HashMap<String, u64>>,
    total_params: Option<u64>,
) -> u32 {
    if let Some(&gb) = curated_registry().get(hf_model_id) {
        return gb;
    }
    if let Some(map) = params_by_dtype {
        if let Some(gb) = estimate_from_safetensors(map) {
            return gb;
        }
    }
    if let Some(total) = total_params {
        return estimate_from_param_count(total);
    }
    DEFAULT_VRAM_GB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_hit_wins_over_everything_else() {
        let mut map = HashMap::new();
        map.insert("F32".to_string(), 70_000_000_000u64); // would estimate ~huge
        let gb = estimate_vram_gb("stabilityai/sd-turbo", Some(&map), Some(999_000_000_000));
        assert_eq!(gb, 8);
    }

    #[test]
    fn safetensors_estimate_used_when_registry_misses() {
        let mut map = HashMap::new();
        map.insert("BF16".to_string(), 7_000_000_000u64);
        let gb = estimate_vram_gb("some/unknown-model", Some(&map), None);
        // 7e9 * 2 bytes * 1.35 ≈ 17.6GB -> snaps to 24.
        assert_eq!(gb, 24);
    }

    #[test]
    fn param_count_fallback_when_no_dtype_breakdown() {
        let gb = estimate_vram_gb("some/unknown-model", None, Some(2_000_000_000));
        assert_eq!(gb, 8);
    }

    #[test]
    fn conservative_default_when_nothing_known() {
        let gb = estimate_vram_gb("some/unknown-model", None, None);
        assert_eq!(gb, 16);
    }
}
