/// Builds a bind group and its layout side by side, so the two can't drift apart.
pub struct BindGroupBuilder<'a> {
    label: &'a str,
    visibility: wgpu::ShaderStages,
    names: Vec<&'a str>,
    layout_entries: Vec<wgpu::BindGroupLayoutEntry>,
    entries: Vec<wgpu::BindGroupEntry<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn new(label: &'a str, visibility: wgpu::ShaderStages) -> Self {
        Self {
            label,
            visibility,
            names: Vec::new(),
            layout_entries: Vec::new(),
            entries: Vec::new(),
        }
    }

    fn entry(
        mut self,
        binding: u32,
        name: &'a str,
        ty: wgpu::BindingType,
        resource: wgpu::BindingResource<'a>,
    ) -> Self {
        self.names.push(name);
        self.layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty,
            count: None,
        });
        self.entries.push(wgpu::BindGroupEntry { binding, resource });
        self
    }

    pub fn uniform(self, binding: u32, name: &'a str, resource: wgpu::BindingResource<'a>) -> Self {
        self.entry(
            binding,
            name,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            resource,
        )
    }

    /// Filterable 2D float texture.
    pub fn texture(self, binding: u32, name: &'a str, view: &'a wgpu::TextureView) -> Self {
        self.texture_with(
            binding,
            name,
            wgpu::TextureSampleType::Float { filterable: true },
            view,
        )
    }

    pub fn depth_texture(self, binding: u32, name: &'a str, view: &'a wgpu::TextureView) -> Self {
        self.texture_with(binding, name, wgpu::TextureSampleType::Depth, view)
    }

    fn texture_with(
        self,
        binding: u32,
        name: &'a str,
        sample_type: wgpu::TextureSampleType,
        view: &'a wgpu::TextureView,
    ) -> Self {
        self.entry(
            binding,
            name,
            wgpu::BindingType::Texture {
                sample_type,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            wgpu::BindingResource::TextureView(view),
        )
    }

    pub fn sampler(self, binding: u32, name: &'a str, sampler: &'a wgpu::Sampler) -> Self {
        self.entry(
            binding,
            name,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            wgpu::BindingResource::Sampler(sampler),
        )
    }

    pub fn comparison_sampler(
        self,
        binding: u32,
        name: &'a str,
        sampler: &'a wgpu::Sampler,
    ) -> Self {
        self.entry(
            binding,
            name,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
            wgpu::BindingResource::Sampler(sampler),
        )
    }

    pub fn build(self, device: &wgpu::Device) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
        let layout = self.build_layout(device);
        let bind_group = self.build_with_layout(device, &layout);
        (layout, bind_group)
    }

    pub fn build_layout(&self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} bind group layout", self.label)),
            entries: &self.layout_entries,
        })
    }

    /// Creates a bind group for an existing layout, e.g. when render targets are
    /// recreated after a resize.
    pub fn build_with_layout(
        self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        log::trace!("Bind group {}: {}", self.label, self.names.join(", "));

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.label)),
            layout,
            entries: &self.entries,
        })
    }
}
