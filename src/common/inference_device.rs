use std::str::FromStr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InferenceDevice {
    #[default] CPU,
    CUDA(usize),
}

// Hardcoded device names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU", "cpu"];
const CUDA: [&str; 2] = ["CUDA", "cuda"];

impl InferenceDevice {
    pub fn str(&self) -> &'static str {
        match self {
            InferenceDevice::CPU => CPU[0],
            InferenceDevice::CUDA(_) => CUDA[0],
        }
    }

    pub fn all_inference_devices() -> Vec<&'static str> {
        vec![CPU[1], CUDA[1]]
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceDevice::CPU => f.write_str(self.str()),
            InferenceDevice::CUDA(id) => write!(f, "{}:{}", self.str(), id),
        }
    }
}

/// Accepts `cpu`, `cuda` and `cuda:<device id>`, case-insensitively.
impl FromStr for InferenceDevice {
    type Err = String;

    fn from_str(device: &str) -> Result<Self, Self::Err> {
        let device = device.trim().to_lowercase();
        let (name, id) = match device.split_once(':') {
            Some((name, id)) => {
                let id = id
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device id `{id}`"))?;
                (name.to_string(), id)
            }
            None => (device, 0),
        };

        match name.as_str() {
            n if n == CPU[1] => Ok(InferenceDevice::CPU),
            n if n == CUDA[1] => Ok(InferenceDevice::CUDA(id)),
            other => Err(format!(
                "unknown inference device `{other}` (expected one of: {})",
                Self::all_inference_devices().join(", ")
            )),
        }
    }
}
