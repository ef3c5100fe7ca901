use crate::error::DataError;

/// Template waveforms, laid out `[template][sample][channel]`.
#[derive(Clone, Debug)]
pub struct TemplateSet {
    n_templates: usize,
    n_samples: usize,
    n_channels: usize,
    data: Vec<f32>,
}

impl TemplateSet {
    pub fn new(
        data: Vec<f32>,
        n_templates: usize,
        n_samples: usize,
        n_channels: usize,
    ) -> Result<Self, DataError> {
        let expected = n_templates * n_samples * n_channels;
        if data.len() != expected {
            return Err(DataError::Shape {
                what: "templates",
                shape: vec![n_templates, n_samples, n_channels],
                expected,
                found: data.len(),
            });
        }
        Ok(Self { n_templates, n_samples, n_channels, data })
    }

    pub fn n_templates(&self) -> usize {
        self.n_templates
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Channel with the largest peak-to-peak amplitude. `None` for unknown or flat templates.
    pub fn peak_channel(&self, template: u32) -> Option<usize> {
        let t = template as usize;
        if t >= self.n_templates || self.n_samples == 0 {
            return None;
        }
        let base = t * self.n_samples * self.n_channels;

        let mut best: Option<(usize, f32)> = None;
        for ch in 0..self.n_channels {
            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for s in 0..self.n_samples {
                let v = self.data[base + s * self.n_channels + ch];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            let p2p = hi - lo;
            match best {
                Some((_, b)) if p2p <= b => {}
                _ => best = Some((ch, p2p)),
            }
        }
        best.filter(|&(_, p2p)| p2p > 0.0).map(|(ch, _)| ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_channel_picks_largest_swing() {
        // 1 template, 3 samples, 3 channels
        let data = vec![
            0.0, -1.0, 0.5,
            0.0, -4.0, 0.0,
            0.0, 1.0, -0.5,
        ];
        let set = TemplateSet::new(data, 1, 3, 3).unwrap();
        assert_eq!(set.peak_channel(0), Some(1));
        assert_eq!(set.peak_channel(1), None);
    }

    #[test]
    fn test_flat_template_has_no_peak() {
        let set = TemplateSet::new(vec![0.0; 6], 1, 3, 2).unwrap();
        assert_eq!(set.peak_channel(0), None);
    }
}
