pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Brent Dashboard</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
<style>
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#0f1117;color:#e1e4e8;min-height:100vh}
h1{font-size:22px;margin-bottom:12px;color:#58a6ff}
h2{font-size:16px;font-weight:600;color:#e1e4e8;margin:18px 0 10px;border-bottom:1px solid #30363d;padding-bottom:6px}
h3{font-size:13px;font-weight:600;color:#8b949e;text-transform:uppercase;letter-spacing:1px;margin-bottom:8px}
.layout{display:flex;min-height:100vh}
.sidebar{width:260px;background:#161b22;border-right:1px solid #30363d;padding:16px;flex-shrink:0}
.main{flex:1;padding:20px;max-width:1100px}
.card{background:#161b22;border:1px solid #30363d;border-radius:8px;padding:14px;margin-bottom:12px}
.grid{display:grid;grid-template-columns:1fr 1fr;gap:12px}
.stats{display:grid;grid-template-columns:repeat(4,1fr);gap:8px}
.stat{background:#0d1117;border:1px solid #21262d;border-radius:6px;padding:8px}
.stat span{display:block;color:#8b949e;font-size:11px;text-transform:uppercase}
.stat strong{font-size:16px}
.banner{padding:10px 14px;border-radius:6px;margin-bottom:12px;font-size:14px}
.banner-ok{background:#12261e;border:1px solid #238636;color:#3fb950}
.banner-wait{background:#272115;border:1px solid #d29922;color:#d29922}
.banner-err{background:#2d1416;border:1px solid #da3633;color:#f85149}
input,select{background:#0d1117;border:1px solid #30363d;color:#e1e4e8;padding:6px 10px;border-radius:4px;font-size:13px;width:100%}
input[type=checkbox]{width:auto}
input:focus,select:focus{outline:none;border-color:#58a6ff}
label{font-size:12px;color:#8b949e;display:block;margin-bottom:3px;margin-top:10px}
.row{display:flex;gap:8px;align-items:flex-end}
.row>*{flex:1}
button{padding:8px 14px;border:none;border-radius:6px;font-size:13px;font-weight:600;cursor:pointer;transition:opacity .15s;margin-top:12px;width:100%}
button:hover{opacity:.85}
button:disabled{opacity:.4;cursor:not-allowed}
.btn-primary{background:#238636;color:#fff}
.btn-muted{background:#30363d;color:#e1e4e8}
a{color:#58a6ff;font-size:12px}
table{width:100%;border-collapse:collapse;font-size:12px;font-family:'SF Mono',Monaco,Consolas,monospace}
th{text-align:left;color:#8b949e;font-weight:600;border-bottom:1px solid #30363d;padding:4px}
td{padding:3px 4px;border-bottom:1px solid #21262d}
.scroll{max-height:320px;overflow-y:auto}
.up{color:#3fb950}
.down{color:#f85149}
.events{max-height:200px;overflow-y:auto;font-size:12px;font-family:'SF Mono',Monaco,Consolas,monospace}
.ev{padding:3px 0;border-bottom:1px solid #21262d;display:flex;gap:8px}
.ev-ts{color:#484f58;min-width:55px}
.ev-kind{color:#58a6ff;min-width:60px;font-weight:600}
.ev-error .ev-kind{color:#da3633}
.muted{color:#8b949e;font-size:12px}
.hidden{display:none}
</style>
</head>
<body>
<div class="layout">

<aside class="sidebar">
  <h3>Forecast settings</h3>
  <label for="periods">How many days to forecast?</label>
  <input id="periods" type="number" min="1" value="30">
  <label for="model">Model</label>
  <select id="model">
    <option value="additive">Additive (trend + seasonality)</option>
    <option value="arima">ARIMA</option>
  </select>
  <label><input id="history" type="checkbox" checked> Include history</label>
  <button class="btn-primary" id="btn-forecast" onclick="generateForecast()" disabled>Generate forecast</button>
  <a id="csv-link" href="#" class="hidden">Download CSV</a>

  <h3 style="margin-top:24px">Date range</h3>
  <label for="start">Start</label>
  <input id="start" type="date">
  <label for="end">End</label>
  <input id="end" type="date">
  <label for="window">Rolling window (days)</label>
  <input id="window" type="number" min="1" value="30">
  <button class="btn-muted" onclick="loadSummary()">Apply</button>
  <button class="btn-muted" onclick="reloadData()">Reload data</button>
</aside>

<main class="main">
  <h1 id="title">Brent crude oil price analysis</h1>
  <div id="banner" class="banner banner-wait">Loading model and dataset...</div>

  <section id="forecast-section" class="hidden">
    <h2>Forecast results</h2>
    <div class="card">
      <div class="muted" id="forecast-meta"></div>
      <div class="scroll"><table id="forecast-table"></table></div>
    </div>
    <h2>Forecast chart</h2>
    <div class="card"><canvas id="forecast-chart" height="110"></canvas></div>
  </section>

  <section>
    <h2>Dashboard</h2>
    <div class="card"><div class="stats" id="stats"></div></div>
    <div class="card"><h3>Price and rolling mean</h3><canvas id="price-chart" height="110"></canvas></div>
    <div class="grid">
      <div class="card"><h3>Yearly average</h3><canvas id="yearly-chart" height="160"></canvas></div>
      <div class="card"><h3>Price distribution</h3><canvas id="histogram-chart" height="160"></canvas></div>
    </div>
  </section>

  <section>
    <h2>Insights</h2>
    <div class="grid">
      <div class="card"><h3>Largest daily rises</h3><table id="rises"></table></div>
      <div class="card"><h3>Largest daily falls</h3><table id="falls"></table></div>
    </div>
    <div class="card"><h3>Daily change (%)</h3><canvas id="change-chart" height="90"></canvas></div>
    <div class="card"><h3>By year</h3><div class="scroll"><table id="yearly-table"></table></div></div>
  </section>

  <section>
    <h2>Model</h2>
    <div class="grid">
      <div class="card"><h3>Additive model</h3><div id="additive-info" class="muted"></div></div>
      <div class="card"><h3>ARIMA</h3><div id="arima-info" class="muted"></div></div>
    </div>
    <div class="card"><h3>Holdout validation</h3><table id="validation"></table></div>
    <div class="card"><h3>Events</h3><div class="events" id="events"></div></div>
  </section>
</main>
</div>

<script>
const charts = {};
const fmt = (v, d = 2) => (v === null || v === undefined) ? '-' : Number(v).toFixed(d);
const pct = v => (v === null || v === undefined) ? '-' : (v * 100).toFixed(2) + '%';

function drawChart(id, config) {
  if (charts[id]) charts[id].destroy();
  charts[id] = new Chart(document.getElementById(id), config);
}

function lineOptions() {
  return {
    animation: false,
    responsive: true,
    elements: { point: { radius: 0 } },
    interaction: { mode: 'index', intersect: false },
    scales: { x: { ticks: { maxTicksLimit: 12, color: '#8b949e' } }, y: { ticks: { color: '#8b949e' } } },
    plugins: { legend: { labels: { color: '#e1e4e8' } } }
  };
}

async function api(url, options) {
  const res = await fetch(url, options);
  const body = res.headers.get('content-type')?.includes('json') ? await res.json() : await res.text();
  if (!res.ok) throw new Error(body.error || body || res.statusText);
  return body;
}

function esc(text) {
  const el = document.createElement('span');
  el.textContent = String(text);
  return el.innerHTML;
}

function setBanner(kind, text) {
  const el = document.getElementById('banner');
  el.className = 'banner banner-' + kind;
  el.textContent = text;
}

let ready = false;

async function refreshStatus() {
  try {
    const s = await api('/api/status');
    document.getElementById('title').textContent = s.page_title;
    document.title = s.page_title;
    const periods = document.getElementById('periods');
    periods.max = s.max_periods;
    if (!periods.dataset.touched) periods.value = s.default_periods;
    document.getElementById('btn-forecast').disabled = !s.model_loaded;

    if (s.model_loaded) {
      setBanner('ok', 'Model loaded successfully! ' + s.observations + ' observations from ' + s.first_date + ' to ' + s.last_date + '.');
      if (!ready) {
        ready = true;
        document.getElementById('start').value = s.first_date;
        document.getElementById('end').value = s.last_date;
        loadSummary();
        loadModel();
      }
    } else if (s.phase === 'failed') {
      setBanner('err', 'Loading failed: ' + s.error);
    } else {
      setBanner('wait', 'Loading model and dataset...');
    }
  } catch (e) {
    setBanner('err', 'Status unavailable: ' + e.message);
  }
  refreshEvents();
}

async function refreshEvents() {
  try {
    const events = await api('/api/events');
    const list = document.getElementById('events');
    list.replaceChildren(...events.slice().reverse().map(e => {
      const row = document.createElement('div');
      row.className = 'ev ev-' + e.kind;
      for (const [cls, text] of [['ev-ts', e.ts], ['ev-kind', e.kind], ['', e.detail]]) {
        const span = document.createElement('span');
        if (cls) span.className = cls;
        span.textContent = text;
        row.appendChild(span);
      }
      return row;
    }));
  } catch (e) { /* status banner already reports it */ }
}

function forecastQuery() {
  const params = new URLSearchParams({
    periods: document.getElementById('periods').value,
    model: document.getElementById('model').value,
    include_history: document.getElementById('history').checked
  });
  return params.toString();
}

async function generateForecast() {
  const btn = document.getElementById('btn-forecast');
  btn.disabled = true;
  btn.textContent = 'Forecasting...';
  try {
    const query = forecastQuery();
    const f = await api('/api/forecast?' + query);
    document.getElementById('forecast-section').classList.remove('hidden');
    document.getElementById('forecast-meta').textContent =
      `${f.model}: ${f.periods} days after ${f.history_end}, ${Math.round(f.interval_width * 100)}% interval`;

    const rows = f.rows;
    document.getElementById('forecast-table').innerHTML =
      '<tr><th>ds</th><th>yhat</th><th>yhat_lower</th><th>yhat_upper</th></tr>' +
      rows.map(r => `<tr><td>${r.ds}</td><td>${fmt(r.yhat)}</td><td>${fmt(r.yhat_lower)}</td><td>${fmt(r.yhat_upper)}</td></tr>`).join('');

    const labels = rows.map(r => r.ds);
    drawChart('forecast-chart', {
      type: 'line',
      data: {
        labels,
        datasets: [
          { label: 'yhat_upper', data: rows.map(r => r.yhat_upper), borderColor: 'rgba(88,166,255,0.2)', backgroundColor: 'rgba(88,166,255,0.15)', fill: '+1', borderWidth: 1 },
          { label: 'yhat_lower', data: rows.map(r => r.yhat_lower), borderColor: 'rgba(88,166,255,0.2)', borderWidth: 1, fill: false },
          { label: 'yhat', data: rows.map(r => r.yhat), borderColor: '#58a6ff', borderWidth: 2, fill: false }
        ]
      },
      options: lineOptions()
    });

    const link = document.getElementById('csv-link');
    link.href = '/api/forecast.csv?' + query;
    link.classList.remove('hidden');
  } catch (e) {
    alert('Forecast failed: ' + e.message);
  } finally {
    btn.disabled = false;
    btn.textContent = 'Generate forecast';
    refreshEvents();
  }
}

async function loadSummary() {
  const params = new URLSearchParams();
  for (const key of ['start', 'end', 'window']) {
    const v = document.getElementById(key).value;
    if (v) params.set(key, v);
  }
  let r;
  try {
    r = await api('/api/summary?' + params.toString());
  } catch (e) {
    const msg = document.createElement('div');
    msg.className = 'muted';
    msg.textContent = e.message;
    document.getElementById('stats').replaceChildren(msg);
    return;
  }

  const s = r.summary;
  const cards = [
    ['Observations', s.count, 0], ['Mean', s.mean], ['Std dev', s.std], ['Median', s.median],
    ['Min', s.min], ['Max', s.max], ['Last price', r.last_price],
    ['Change', fmt(r.change) + (r.change_pct === null ? '' : ' (' + fmt(r.change_pct) + '%)'), null],
  ];
  cards.push(['Max drawdown', pct(r.max_drawdown), null]);
  cards.push(['Q25 / Q75', fmt(s.q25) + ' / ' + fmt(s.q75), null]);
  cards.push(['First date', r.first_date, null]);
  cards.push(['Last date', r.last_date, null]);
  document.getElementById('stats').innerHTML = cards.map(([name, v, d]) =>
    `<div class="stat"><span>${name}</span><strong>${d === null ? v : fmt(v, d ?? 2)}</strong></div>`
  ).join('');

  const labels = r.series.map(p => p.ds);
  drawChart('price-chart', {
    type: 'line',
    data: {
      labels,
      datasets: [
        { label: 'Price', data: r.series.map(p => p.y), borderColor: '#58a6ff', borderWidth: 1 },
        { label: `Rolling mean (${r.rolling_window})`, data: r.series.map(p => p.rolling_mean), borderColor: '#d29922', borderWidth: 2 }
      ]
    },
    options: lineOptions()
  });

  drawChart('yearly-chart', {
    type: 'bar',
    data: { labels: r.yearly.map(y => y.year), datasets: [{ label: 'Mean price', data: r.yearly.map(y => y.mean), backgroundColor: '#238636' }] },
    options: { animation: false, plugins: { legend: { display: false } } }
  });

  drawChart('histogram-chart', {
    type: 'bar',
    data: {
      labels: r.histogram.map(b => fmt(b.lower, 1) + '-' + fmt(b.upper, 1)),
      datasets: [{ label: 'Days', data: r.histogram.map(b => b.count), backgroundColor: '#6e40c9', barPercentage: 1, categoryPercentage: 1 }]
    },
    options: { animation: false, plugins: { legend: { display: false } } }
  });

  drawChart('change-chart', {
    type: 'bar',
    data: { labels, datasets: [{ label: 'Daily change', data: r.series.map(p => p.pct_change === null ? null : p.pct_change * 100), backgroundColor: '#8b949e' }] },
    options: { animation: false, plugins: { legend: { display: false } }, scales: { x: { ticks: { maxTicksLimit: 12 } } } }
  });

  const moveRows = moves => '<tr><th>Date</th><th>Price</th><th>Change</th></tr>' +
    moves.map(m => `<tr><td>${m.ds}</td><td>${fmt(m.y)}</td><td class="${m.pct_change >= 0 ? 'up' : 'down'}">${pct(m.pct_change)}</td></tr>`).join('');
  document.getElementById('rises').innerHTML = moveRows(r.largest_rises);
  document.getElementById('falls').innerHTML = moveRows(r.largest_falls);

  document.getElementById('yearly-table').innerHTML =
    '<tr><th>Year</th><th>Days</th><th>Mean</th><th>Min</th><th>Max</th></tr>' +
    r.yearly.map(y => `<tr><td>${y.year}</td><td>${y.count}</td><td>${fmt(y.mean)}</td><td>${fmt(y.min)}</td><td>${fmt(y.max)}</td></tr>`).join('');
}

async function loadModel() {
  try {
    const m = await api('/api/model');
    const a = m.additive;
    const origin = a.origin.kind === 'downloaded' ? 'downloaded from ' + esc(a.origin.url) : 'fitted locally';
    const seasons = a.seasonalities.map(s => `${s.kind} (order ${s.order})`).join(', ') || 'none';
    const cps = a.changepoints
      .slice()
      .sort((x, y) => Math.abs(y.slope_change) - Math.abs(x.slope_change))
      .slice(0, 5)
      .map(c => `${c.ds}: ${fmt(c.slope_change, 4)}/day`).join('<br>');
    document.getElementById('additive-info').innerHTML =
      `${a.name}, ${origin}<br>History ${a.history_start} to ${a.history_end} (${a.history_len} obs)<br>` +
      `Seasonality: ${seasons}<br>Noise std: ${fmt(a.noise_std)}<br>Largest trend changes:<br>${cps || 'none'}`;

    const ar = m.arima;
    document.getElementById('arima-info').innerHTML = ar
      ? `${ar.name}<br>AR: [${ar.ar_coefficients.map(c => fmt(c, 4)).join(', ')}]<br>` +
        `MA: [${ar.ma_coefficients.map(c => fmt(c, 4)).join(', ')}]<br>Innovation variance: ${fmt(ar.sigma2, 4)}`
      : 'ARIMA unavailable: the series is too short for the configured order';

    document.getElementById('validation').innerHTML =
      '<tr><th>Model</th><th>Train</th><th>Test</th><th>MAE</th><th>RMSE</th><th>MAPE</th><th>Direction</th></tr>' +
      m.validation.map(v => `<tr><td>${v.model}</td><td>${v.train_size}</td><td>${v.test_size}</td><td>${fmt(v.metrics.mae)}</td><td>${fmt(v.metrics.rmse)}</td><td>${fmt(v.metrics.mape)}%</td><td>${fmt(v.metrics.direction_accuracy, 1)}%</td></tr>`).join('');
  } catch (e) {
    document.getElementById('additive-info').textContent = e.message;
  }
}

async function reloadData() {
  setBanner('wait', 'Reloading model and dataset...');
  try {
    await api('/api/reload', { method: 'POST' });
    ready = false;
  } catch (e) {
    setBanner('err', e.message);
  }
  refreshStatus();
}

document.getElementById('periods').addEventListener('input', e => { e.target.dataset.touched = '1'; });
refreshStatus();
setInterval(() => { if (!ready) refreshStatus(); else refreshEvents(); }, 3000);
</script>
</body>
</html>
"##;
