//! ONNX Runtime session wrapper: provider registration, dtype alignment and output extraction.

use anyhow::Result;
use half::{bf16, f16};
use ndarray::{Array, IxDyn};
use parking_lot::Mutex;
use ort::{
    execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider},
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::{Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, Value},
};
use crate::common::InferenceDevice;
use crate::data::{ConfigOrt, Xs, X, CROSS_MARK};
use crate::utils::human_bytes;

/// Names and element types of a session's inputs or outputs, in session order.
#[derive(Debug, Clone, Default)]
pub struct OrtTensorAttr {
    pub names: Vec<String>,
    pub dtypes: Vec<TensorElementType>,
}

/// ONNXRuntime Backend
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex and the
/// engine itself can be shared between request tasks.
#[derive(Debug)]
pub struct OrtEngine {
    session: Mutex<Session>,
    inputs_attrs: OrtTensorAttr,
    outputs_attrs: OrtTensorAttr,
}

impl OrtEngine {
    pub fn new(config: &ConfigOrt) -> Result<Self> {
        let model_bytes = std::fs::metadata(&config.onnx_path)
            .map_err(|e| anyhow::anyhow!("Cannot read model file {}: {}", config.onnx_path, e))?
            .len();

        let ort_init = ort::init_from(&config.ort_lib_path);
        match ort_init.commit() {
            Ok(_) => {},
            Err(e) => {
                anyhow::bail!("Failed to commit ORT from {}: {:?}", config.ort_lib_path, e);
            }
        };

        let mut builder = Session::builder()?;

        let mut device = config.device;
        match device {
            InferenceDevice::CUDA(device_id) => {
                Self::build_cuda(&mut builder, device_id).unwrap_or_else(|err| {
                    log::warn!("{err}, Using cpu");
                    device = InferenceDevice::CPU;
                })
            }
            InferenceDevice::CPU => {
                Self::build_cpu(&mut builder)?;
            }
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.onnx_path)?;

        let inputs_attrs = Self::io_attrs(
            session.inputs.iter().map(|i| (i.name.as_str(), i.input_type.tensor_type())),
        )?;
        let outputs_attrs = Self::io_attrs(
            session.outputs.iter().map(|o| (o.name.as_str(), o.output_type.tensor_type())),
        )?;

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Model: {} ({}) | Inputs: {:?} | Outputs: {:?}",
            device,
            config.onnx_path,
            human_bytes(model_bytes as f64),
            inputs_attrs.names,
            outputs_attrs.names,
        );

        Ok(Self {
            session: Mutex::new(session),
            inputs_attrs,
            outputs_attrs,
        })
    }

    fn build_cuda(builder: &mut SessionBuilder, device_id: usize) -> Result<()> {
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32);
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} CUDA initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CUDA execution provider not available")
        }
    }

    fn build_cpu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = CPUExecutionProvider::default();
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => { }
                Err(err) => { anyhow::bail!("{CROSS_MARK} CPU initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CPU execution provider not available")
        }
    }

    fn io_attrs<'a>(
        io: impl Iterator<Item = (&'a str, Option<TensorElementType>)>,
    ) -> Result<OrtTensorAttr> {
        let mut attrs = OrtTensorAttr::default();
        for (name, dtype) in io {
            let Some(dtype) = dtype else {
                anyhow::bail!("Model input/output `{}` is not a tensor", name);
            };
            attrs.names.push(name.to_string());
            attrs.dtypes.push(dtype);
        }
        Ok(attrs)
    }

    fn tensor_preprocess(x: X, dtype: &TensorElementType) -> Result<DynValue> {
        let x = match dtype {
            TensorElementType::Float32 => Value::from_array(x.0)?.into_dyn(),
            TensorElementType::Float64 => Value::from_array(x.mapv(|x_| x_ as f64))?.into_dyn(),
            TensorElementType::Float16 => Value::from_array(x.mapv(f16::from_f32))?.into_dyn(),
            TensorElementType::Bfloat16 => Value::from_array(x.mapv(bf16::from_f32))?.into_dyn(),
            TensorElementType::Uint8 => Value::from_array(x.mapv(|x_| x_ as u8))?.into_dyn(),
            other => anyhow::bail!("Unsupported model input type: {:?}", other),
        };
        Ok(x)
    }

    fn tensor_postprocess(x: &DynValue, dtype: &TensorElementType) -> Result<Array<f32, IxDyn>> {
        fn _extract_and_convert<T>(x: &DynValue, map_fn: impl Fn(T) -> f32) -> Result<Array<f32, IxDyn>>
        where
            T: Clone + 'static + ort::tensor::PrimitiveTensorElementType,
        {
            Ok(x.try_extract_array::<T>()?.mapv(map_fn))
        }
        match dtype {
            TensorElementType::Float32 => _extract_and_convert::<f32>(x, |x| x),
            TensorElementType::Float16 => _extract_and_convert::<f16>(x, f16::to_f32),
            TensorElementType::Bfloat16 => _extract_and_convert::<bf16>(x, bf16::to_f32),
            TensorElementType::Float64 => _extract_and_convert::<f64>(x, |x| x as f32),
            TensorElementType::Int64 => _extract_and_convert::<i64>(x, |x| x as f32),
            TensorElementType::Int32 => _extract_and_convert::<i32>(x, |x| x as f32),
            _ => Err(anyhow::anyhow!("Unsupported ort tensor type: {:?}", dtype)),
        }
    }

    /// Runs the session. Inputs are cast to the model's element types and outputs are
    /// returned as `f32`, in session output order.
    pub fn engine_run(&self, xs: Xs) -> Result<Xs> {
        if xs.len() != self.inputs_attrs.names.len() {
            anyhow::bail!(
                "Model expects {} inputs, got {}",
                self.inputs_attrs.names.len(),
                xs.len()
            );
        }

        let mut xs_ = Vec::new();
        for (dtype, x) in self.inputs_attrs.dtypes.iter().zip(xs.into_iter()) {
            xs_.push(Into::<SessionInputValue<'_>>::into(Self::tensor_preprocess(x, dtype)?));
        }

        let mut session = self.session.lock();
        let outputs = session.run(&xs_[..])?;

        let mut ys = Xs::new();
        for (dtype, name) in self.outputs_attrs.dtypes.iter().zip(self.outputs_attrs.names.iter()) {
            let y = Self::tensor_postprocess(&outputs[name.as_str()], dtype)?;
            ys.push(X::from(y));
        }

        Ok(ys)
    }

    pub fn try_fetch(&self, key: &str) -> Option<String> {
        let session = self.session.lock();
        let value = match session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or_default(),
        };
        value
    }

    pub fn out_names(&self) -> &Vec<String> {
        &self.outputs_attrs.names
    }
}
